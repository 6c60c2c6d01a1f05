//! Handlers for the lead endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/` | Leads visible to the caller |
//! | `POST` | `/` | Optional [`LeadBody`]; client `id`/`owner` are discarded |
//! | `PUT`  | `/` | [`LeadBody`] with required `id`; partial update |
//! | `GET`  | `/{id}` | 404 if missing or not visible |
//! | `PUT`  | `/{id}/addEmail` | `?folderId&messageUid[&roleIds=1,2]` or repeated `roleIds` |
//! | `POST` | `/newWithEmail` | Same query as `addEmail` |
//! | `PUT`  | `/{id}/addNote` | Body: `{"text":"...","roleIds":[1]}` |

use std::collections::BTreeSet;

use axum::{
  Json,
  extract::{Path, RawQuery, State},
  http::StatusCode,
};
use bytes::Bytes;
use crmmail_core::{
  event::EmailMessage,
  lead::{Lead, LeadBody, LeadId},
  security::RoleId,
  store::LeadStore,
};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{AppState, auth::Caller, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
) -> Result<Json<Vec<Lead>>, ApiError>
where
  S: LeadStore + 'static,
{
  let leads = state.leads.list_visible(&caller).await?;
  Ok(Json(leads))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /`: an empty body (or `null`) creates an empty lead.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  body: Bytes,
) -> Result<Json<Lead>, ApiError>
where
  S: LeadStore + 'static,
{
  let body = parse_optional_body(&body)?.strip_identity();
  let input = state.leads.fill_defaults(body, &caller);
  let lead = state.leads.create(input).await?;
  tracing::info!(lead_id = %lead.id, owner = %caller.id, "lead created");
  Ok(Json(lead))
}

fn parse_optional_body(raw: &[u8]) -> Result<LeadBody, ApiError> {
  if raw.iter().all(u8::is_ascii_whitespace) {
    return Ok(LeadBody::default());
  }
  let body: Option<LeadBody> = parse_json(raw)?;
  Ok(body.unwrap_or_default())
}

/// Decode a JSON body, reporting any failure as a 400 with a JSON error.
fn parse_json<T: DeserializeOwned>(raw: &[u8]) -> Result<T, ApiError> {
  serde_json::from_slice(raw).map_err(|e| ApiError::BadRequest(format!("invalid body: {e}")))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /`: every non-null field in the body overwrites the stored lead.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  body: Bytes,
) -> Result<Json<Lead>, ApiError>
where
  S: LeadStore + 'static,
{
  let body: LeadBody = parse_json(&body)?;
  let id = body
    .id
    .ok_or_else(|| ApiError::InvalidField("Lead id should not be null".into()))?;

  let mut lead = state.leads.load(id, &caller).await?;

  // Owner and allowed roles are merged like any other field.
  if body.touches_security(&lead) {
    tracing::warn!(
      lead_id = %id,
      caller = %caller.id,
      "update rewrites owner or allowed roles"
    );
  }
  body.merge_into(&mut lead);

  let saved = state.leads.save(lead).await?;
  Ok(Json(saved))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path(id): Path<LeadId>,
) -> Result<Json<Lead>, ApiError>
where
  S: LeadStore + 'static,
{
  let lead = state.leads.load(id, &caller).await?;
  Ok(Json(lead))
}

// ─── Email events ─────────────────────────────────────────────────────────────

/// Query parameters of the email endpoints.
///
/// `roleIds` may be comma-separated, repeated, or both; every occurrence is
/// merged into one set. Absent means "inherit".
#[derive(Debug)]
pub struct EmailParams {
  pub message:  EmailMessage,
  pub role_ids: Option<BTreeSet<RoleId>>,
}

impl EmailParams {
  /// Parse and validate the raw query string.
  pub fn parse(query: Option<&str>) -> Result<Self, ApiError> {
    let mut folder_id = None;
    let mut message_uid = None;
    let mut role_ids: Option<BTreeSet<RoleId>> = None;

    for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
      match key.as_ref() {
        "folderId" => folder_id = Some(value.into_owned()),
        "messageUid" => {
          let uid = value.trim().parse::<i64>().map_err(|_| {
            ApiError::BadRequest(format!("invalid messageUid {value:?}"))
          })?;
          message_uid = Some(uid);
        }
        "roleIds" => role_ids.get_or_insert_default().extend(parse_role_ids(&value)?),
        _ => {}
      }
    }

    let folder_id =
      folder_id.ok_or_else(|| ApiError::BadRequest("missing folderId".into()))?;
    let message_uid =
      message_uid.ok_or_else(|| ApiError::BadRequest("missing messageUid".into()))?;
    Ok(Self {
      message: EmailMessage::new(folder_id, message_uid)?,
      role_ids,
    })
  }
}

/// `PUT /{id}/addEmail?folderId=...&messageUid=...[&roleIds=...]`
pub async fn add_email<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path(id): Path<LeadId>,
  RawQuery(query): RawQuery,
) -> Result<StatusCode, ApiError>
where
  S: LeadStore + 'static,
{
  // Malformed parameters are rejected before the lead is looked up.
  let params = EmailParams::parse(query.as_deref())?;

  let lead = state.leads.load(id, &caller).await?;
  let event = state
    .leads
    .attach_email_event(&lead, params.message, params.role_ids, &caller)
    .await?;

  tracing::info!(
    lead_id = %id,
    event_id = ?event.id,
    owner = %caller.id,
    "email attached to lead"
  );
  Ok(StatusCode::OK)
}

/// `POST /newWithEmail?folderId=...&messageUid=...[&roleIds=...]`
pub async fn new_with_email<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  RawQuery(query): RawQuery,
) -> Result<StatusCode, ApiError>
where
  S: LeadStore + 'static,
{
  let params = EmailParams::parse(query.as_deref())?;

  let lead = state
    .leads
    .create_with_email(params.message, params.role_ids, &caller)
    .await?;

  tracing::info!(lead_id = %lead.id, owner = %caller.id, "lead created from email");
  Ok(StatusCode::OK)
}

/// Parse a comma-separated list of role ids. Blank entries are skipped; an
/// empty string yields an empty set.
pub fn parse_role_ids(raw: &str) -> Result<BTreeSet<RoleId>, ApiError> {
  raw
    .split(',')
    .map(str::trim)
    .filter(|part| !part.is_empty())
    .map(|part| {
      part
        .parse::<i64>()
        .map(RoleId)
        .map_err(|_| ApiError::BadRequest(format!("invalid role id {part:?} in roleIds")))
    })
    .collect()
}

// ─── Notes ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteBody {
  pub text:     String,
  pub role_ids: Option<BTreeSet<RoleId>>,
}

/// `PUT /{id}/addNote` with body `{"text":"...","roleIds":[1,2]}`
pub async fn add_note<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path(id): Path<LeadId>,
  body: Bytes,
) -> Result<StatusCode, ApiError>
where
  S: LeadStore + 'static,
{
  let body: NoteBody = parse_json(&body)?;
  let lead = state.leads.load(id, &caller).await?;
  state
    .leads
    .attach_note(&lead, body.text, body.role_ids, &caller)
    .await?;
  Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn role_ids_parse_and_dedupe() {
    let ids = parse_role_ids("2, 1,2,").unwrap();
    assert_eq!(ids, [RoleId(1), RoleId(2)].into());
  }

  #[test]
  fn empty_role_ids_is_empty_set() {
    assert!(parse_role_ids("").unwrap().is_empty());
  }

  #[test]
  fn malformed_role_id_is_rejected() {
    assert!(matches!(parse_role_ids("1,admin"), Err(ApiError::BadRequest(_))));
  }

  #[test]
  fn blank_and_null_bodies_mean_empty_lead() {
    assert!(parse_optional_body(b"").unwrap().id.is_none());
    assert!(parse_optional_body(b"  \n").unwrap().id.is_none());
    assert!(parse_optional_body(b"null").unwrap().id.is_none());
    assert!(matches!(parse_optional_body(b"{"), Err(ApiError::BadRequest(_))));
  }

  #[test]
  fn wrongly_typed_body_is_bad_request() {
    let err = parse_json::<LeadBody>(br#"{"id":"seven"}"#).unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));
  }

  #[test]
  fn email_params_merge_repeated_and_comma_separated_roles() {
    let params =
      EmailParams::parse(Some("folderId=INBOX&messageUid=42&roleIds=1&roleIds=2,3")).unwrap();
    assert_eq!(params.message.folder_id, "INBOX");
    assert_eq!(params.message.message_uid, 42);
    assert_eq!(params.role_ids, Some([RoleId(1), RoleId(2), RoleId(3)].into()));
  }

  #[test]
  fn email_params_decode_percent_escapes() {
    let params = EmailParams::parse(Some("folderId=Sent%20Items&messageUid=7")).unwrap();
    assert_eq!(params.message.folder_id, "Sent Items");
    assert_eq!(params.role_ids, None);
  }

  #[test]
  fn email_params_reject_malformed_input() {
    for query in [
      None,
      Some("messageUid=1"),
      Some("folderId=INBOX"),
      Some("folderId=INBOX&messageUid=abc"),
      Some("folderId=INBOX&messageUid=1&roleIds=x"),
    ] {
      assert!(matches!(EmailParams::parse(query), Err(ApiError::BadRequest(_))), "{query:?}");
    }
    for query in ["folderId=&messageUid=1", "folderId=INBOX&messageUid=-5"] {
      assert!(matches!(EmailParams::parse(Some(query)), Err(ApiError::InvalidField(_))), "{query}");
    }
  }
}
