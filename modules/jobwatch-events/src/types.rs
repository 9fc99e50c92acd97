//! Event record and the typed payloads decoded from it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tag::{classify, EventKind, TagError};

/// Function whose results carry a minion's grains.
pub const GRAINS_FUNCTION: &str = "grains.items";

/// One record off the event bus, in its full `{tag, data}` form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaltEvent {
    pub tag: String,
    #[serde(default)]
    pub data: Value,
}

impl SaltEvent {
    pub fn new(tag: impl Into<String>, data: Value) -> Self {
        Self {
            tag: tag.into(),
            data,
        }
    }

    pub fn kind(&self) -> Result<EventKind<'_>, TagError> {
        classify(&self.tag)
    }

    /// Decode the payload of a `new` job event.
    pub fn new_job_data(&self) -> Result<NewJobData, serde_json::Error> {
        NewJobData::deserialize(&self.data)
    }

    /// Decode the payload of a `ret` job event.
    pub fn job_return_data(&self) -> Result<JobReturnData, serde_json::Error> {
        JobReturnData::deserialize(&self.data)
    }
}

/// Payload of `salt/job/<jid>/new`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewJobData {
    pub jid: String,
    #[serde(rename = "_stamp")]
    pub stamp: String,
    pub fun: String,
    pub tgt: Value,
    pub tgt_type: String,
    pub minions: Vec<String>,
}

/// Payload of `salt/job/<jid>/ret/<mid>`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobReturnData {
    #[serde(rename = "return")]
    pub ret: Value,
    pub retcode: i64,
    pub success: bool,
    /// Only consulted when grains are tracked.
    #[serde(default)]
    pub fun: Option<String>,
}

impl JobReturnData {
    pub fn is_grains(&self) -> bool {
        self.fun.as_deref() == Some(GRAINS_FUNCTION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_new_job_payload() {
        let event = SaltEvent::new(
            "salt/job/20230101000000000001/new",
            json!({
                "jid": "20230101000000000001",
                "_stamp": "2023-01-01T00:00:00.000000",
                "fun": "test.ping",
                "arg": [],
                "tgt": ["web1", "web2"],
                "tgt_type": "list",
                "user": "root",
                "minions": ["web1", "web2"],
            }),
        );

        let data = event.new_job_data().unwrap();
        assert_eq!(data.jid, "20230101000000000001");
        assert_eq!(data.stamp, "2023-01-01T00:00:00.000000");
        assert_eq!(data.tgt, json!(["web1", "web2"]));
        assert_eq!(data.minions, vec!["web1", "web2"]);
    }

    #[test]
    fn missing_new_job_field_names_the_field() {
        let event = SaltEvent::new("salt/job/1/new", json!({"jid": "1", "fun": "test.ping"}));
        let err = event.new_job_data().unwrap_err();
        assert!(err.to_string().contains("missing field"), "{err}");
    }

    #[test]
    fn return_payload_keeps_value_as_is() {
        let event = SaltEvent::new(
            "salt/job/1/ret/web1",
            json!({"return": {"os": "Debian"}, "retcode": 0, "success": true, "fun": "grains.items"}),
        );
        let data = event.job_return_data().unwrap();
        assert_eq!(data.ret, json!({"os": "Debian"}));
        assert!(data.is_grains());
    }

    #[test]
    fn return_payload_without_fun_is_not_grains() {
        let event = SaltEvent::new(
            "salt/job/1/ret/web1",
            json!({"return": null, "retcode": 1, "success": false}),
        );
        let data = event.job_return_data().unwrap();
        assert_eq!(data.ret, Value::Null);
        assert!(!data.is_grains());
    }

    #[test]
    fn return_payload_requires_success() {
        let event = SaltEvent::new("salt/job/1/ret/web1", json!({"return": true, "retcode": 0}));
        assert!(event.job_return_data().is_err());
    }

    #[test]
    fn event_without_data_defaults_to_null() {
        let event: SaltEvent = serde_json::from_str(r#"{"tag": "salt/auth"}"#).unwrap();
        assert_eq!(event.data, Value::Null);
    }
}
