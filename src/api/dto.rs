//! Data Transfer Objects for API requests and responses.
//!
//! Request fields are taken as raw optional strings so that every problem in
//! a body can be reported at once, as `field: 'reason'` entries.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{FieldError, ValidationError};
use crate::domain::{Item, ItemId, ItemStatus};
use crate::service::{MUST_BE_FUTURE, MUST_NOT_BE_BLANK};

/// Reason given for a missing due instant.
pub const MUST_NOT_BE_NULL: &str = "must not be null";
/// Reason given for an unparseable due instant.
pub const MUST_BE_DATE_TIME: &str = "must be a valid ISO-8601 date-time";
/// Reason given for a path id that is not a positive integer.
pub const MUST_BE_POSITIVE_ID: &str = "must be greater than or equal to 1";

// =============================================================================
// Item DTOs
// =============================================================================

/// Request DTO for creating an item.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    /// Text of the to-do.
    #[serde(default)]
    pub description: Option<String>,
    /// Due instant, ISO-8601.
    #[serde(default)]
    pub due_date_time: Option<String>,
}

/// Request DTO for a partial update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    /// New text, if any.
    #[serde(default)]
    pub description: Option<String>,
    /// New due instant, if any.
    #[serde(default)]
    pub due_date_time: Option<String>,
}

/// Query string of the list endpoint.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Include `done` items.
    #[serde(default)]
    pub include_all: bool,
}

/// Response DTO for an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    /// Item id.
    pub id: i64,
    /// Text of the to-do.
    pub description: String,
    /// Status label.
    pub status: ItemStatus,
    /// Due instant.
    pub due_date_time: DateTime<Utc>,
    /// Completion instant, `null` unless done.
    pub done_at: Option<DateTime<Utc>>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}

impl From<&Item> for ItemResponse {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.as_i64(),
            description: item.description.clone(),
            status: item.status,
            due_date_time: item.due_date_time,
            done_at: item.done_at,
            created_at: item.created_at,
        }
    }
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        Self::from(&item)
    }
}

// =============================================================================
// Validated inputs
// =============================================================================

/// A create request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItemInput {
    pub description: String,
    pub due_date_time: DateTime<Utc>,
}

/// An update request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemChanges {
    pub description: Option<String>,
    pub due_date_time: Option<DateTime<Utc>>,
}

// =============================================================================
// Validation Functions
// =============================================================================

/// Parses an ISO-8601 instant.
///
/// Offsets are honoured; a value without one is read as UTC.
#[must_use]
pub fn parse_date_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|instant| instant.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Parses a path id.
///
/// # Errors
///
/// Returns a validation error on `id` unless the value is an integer `>= 1`.
pub fn parse_item_id(raw: &str) -> Result<ItemId, ValidationError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(ItemId::new)
        .ok_or_else(|| ValidationError::single("id", MUST_BE_POSITIVE_ID))
}

fn check_future(
    raw: &str,
    now: DateTime<Utc>,
    errors: &mut Vec<FieldError>,
) -> Option<DateTime<Utc>> {
    match parse_date_time(raw) {
        Some(instant) if instant > now => Some(instant),
        Some(_) => {
            errors.push(FieldError::new("dueDateTime", MUST_BE_FUTURE));
            None
        }
        None => {
            errors.push(FieldError::new("dueDateTime", MUST_BE_DATE_TIME));
            None
        }
    }
}

/// Validates a create request against `now`.
///
/// # Errors
///
/// Returns every field problem found.
pub fn validate_create_request(
    request: &CreateItemRequest,
    now: DateTime<Utc>,
) -> Result<NewItemInput, ValidationError> {
    let mut errors = Vec::new();

    let description = match request.description.as_deref() {
        Some(text) if !text.trim().is_empty() => Some(text.to_string()),
        _ => {
            errors.push(FieldError::new("description", MUST_NOT_BE_BLANK));
            None
        }
    };

    let due_date_time = match request.due_date_time.as_deref() {
        Some(raw) => check_future(raw, now, &mut errors),
        None => {
            errors.push(FieldError::new("dueDateTime", MUST_NOT_BE_NULL));
            None
        }
    };

    match (description, due_date_time) {
        (Some(description), Some(due_date_time)) if errors.is_empty() => Ok(NewItemInput {
            description,
            due_date_time,
        }),
        _ => Err(ValidationError::new(errors)),
    }
}

/// Validates an update request against `now`. Absent fields stay absent.
///
/// # Errors
///
/// Returns every field problem found.
pub fn validate_update_request(
    request: &UpdateItemRequest,
    now: DateTime<Utc>,
) -> Result<ItemChanges, ValidationError> {
    let mut errors = Vec::new();

    if request
        .description
        .as_deref()
        .is_some_and(|text| text.trim().is_empty())
    {
        errors.push(FieldError::new("description", MUST_NOT_BE_BLANK));
    }
    let due_date_time = request
        .due_date_time
        .as_deref()
        .and_then(|raw| check_future(raw, now, &mut errors));

    if errors.is_empty() {
        Ok(ItemChanges {
            description: request.description.clone(),
            due_date_time,
        })
    } else {
        Err(ValidationError::new(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
    }

    fn create(description: Option<&str>, due: Option<&str>) -> CreateItemRequest {
        CreateItemRequest {
            description: description.map(str::to_string),
            due_date_time: due.map(str::to_string),
        }
    }

    // -------------------------------------------------------------------------
    // parse_date_time
    // -------------------------------------------------------------------------

    #[rstest]
    #[case("2030-01-01T00:00:01Z", 1)]
    #[case("2030-01-01T02:00:01+02:00", 1)]
    #[case("2030-01-01T00:00:01", 1)]
    #[case("2030-01-01T00:00:01.500", 1)]
    fn test_parse_date_time(#[case] raw: &str, #[case] seconds: i64) {
        let parsed = parse_date_time(raw).unwrap();
        assert_eq!(parsed.timestamp(), now().timestamp() + seconds);
    }

    #[rstest]
    #[case("tomorrow")]
    #[case("2030-13-01T00:00:00Z")]
    #[case("")]
    fn test_parse_date_time_invalid(#[case] raw: &str) {
        assert!(parse_date_time(raw).is_none());
    }

    // -------------------------------------------------------------------------
    // parse_item_id
    // -------------------------------------------------------------------------

    #[rstest]
    #[case("1", Some(1))]
    #[case("42", Some(42))]
    #[case("0", None)]
    #[case("-1", None)]
    #[case("abc", None)]
    fn test_parse_item_id(#[case] raw: &str, #[case] expected: Option<i64>) {
        assert_eq!(parse_item_id(raw).ok().map(ItemId::as_i64), expected);
    }

    #[rstest]
    fn test_parse_item_id_error_message() {
        let error = parse_item_id("0").unwrap_err();
        assert_eq!(
            error.errors[0].to_string(),
            "id: 'must be greater than or equal to 1'"
        );
    }

    // -------------------------------------------------------------------------
    // validate_create_request
    // -------------------------------------------------------------------------

    #[rstest]
    fn test_validate_create_request_valid() {
        let input = validate_create_request(
            &create(Some("write report"), Some("2030-01-02T00:00:00Z")),
            now(),
        )
        .unwrap();
        assert_eq!(input.description, "write report");
    }

    #[rstest]
    #[case(create(Some(" "), Some("2030-01-02T00:00:00Z")), vec!["description: 'must not be blank'"])]
    #[case(create(None, Some("2030-01-02T00:00:00Z")), vec!["description: 'must not be blank'"])]
    #[case(create(Some("a"), None), vec!["dueDateTime: 'must not be null'"])]
    #[case(create(Some("a"), Some("2029-12-31T23:59:59Z")), vec!["dueDateTime: 'must be a future date'"])]
    #[case(create(Some("a"), Some("2030-01-01T00:00:00Z")), vec!["dueDateTime: 'must be a future date'"])]
    #[case(create(Some("a"), Some("soon")), vec!["dueDateTime: 'must be a valid ISO-8601 date-time'"])]
    #[case(
        create(None, None),
        vec!["description: 'must not be blank'", "dueDateTime: 'must not be null'"]
    )]
    fn test_validate_create_request_errors(
        #[case] request: CreateItemRequest,
        #[case] expected: Vec<&str>,
    ) {
        let error = validate_create_request(&request, now()).unwrap_err();
        let messages: Vec<String> = error.errors.iter().map(ToString::to_string).collect();
        assert_eq!(messages, expected);
    }

    // -------------------------------------------------------------------------
    // validate_update_request
    // -------------------------------------------------------------------------

    #[rstest]
    fn test_validate_update_request_empty_is_valid() {
        let changes = validate_update_request(&UpdateItemRequest::default(), now()).unwrap();
        assert_eq!(changes, ItemChanges::default());
    }

    #[rstest]
    fn test_validate_update_request_rejects_blank_description() {
        let request = UpdateItemRequest {
            description: Some(String::new()),
            due_date_time: None,
        };
        let error = validate_update_request(&request, now()).unwrap_err();
        assert_eq!(error, ValidationError::single("description", MUST_NOT_BE_BLANK));
    }

    // -------------------------------------------------------------------------
    // Response Tests
    // -------------------------------------------------------------------------

    #[rstest]
    fn test_item_response_wire_format() {
        let item = crate::domain::ItemDraft::new("write report", now(), now())
            .into_item(ItemId::from_i64(1));

        let json = serde_json::to_value(ItemResponse::from(&item)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "id": 1,
                "description": "write report",
                "status": "not done",
                "dueDateTime": "2030-01-01T00:00:00Z",
                "doneAt": null,
                "createdAt": "2030-01-01T00:00:00Z",
            })
        );
    }

    #[rstest]
    fn test_list_query_default() {
        let query: ListQuery = serde_json::from_str("{}").unwrap();
        assert!(!query.include_all);
    }
}
