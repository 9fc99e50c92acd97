//! Positional tag classification.
//!
//! Job events on the salt bus are tagged `salt/job/<jid>/new` and
//! `salt/job/<jid>/ret/<mid>`. Only the second and fourth segments decide
//! the kind; everything else is ignored.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind<'a> {
    /// A job was published to its targets. The jid is read from the payload.
    NewJob,
    /// One minion returned for a job.
    JobReturn { jid: &'a str, mid: &'a str },
    /// Not a job event the projection tracks.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("job tag {tag:?} has {found} segments, expected at least 4")]
    TruncatedJobTag { tag: String, found: usize },

    #[error("return tag {tag:?} has {found} segments, expected exactly 5")]
    MalformedReturnTag { tag: String, found: usize },
}

/// Classify an event tag.
///
/// Tags whose second segment is not `job` (including tags with a single
/// segment) are ignored. A `job` tag must carry a fourth segment, and a
/// `ret` tag must have exactly five.
pub fn classify(tag: &str) -> Result<EventKind<'_>, TagError> {
    let parts: Vec<&str> = tag.split('/').collect();

    if parts.get(1) != Some(&"job") {
        return Ok(EventKind::Ignored);
    }

    let Some(kind) = parts.get(3) else {
        return Err(TagError::TruncatedJobTag {
            tag: tag.to_string(),
            found: parts.len(),
        });
    };

    match *kind {
        "new" => Ok(EventKind::NewJob),
        "ret" => match parts.as_slice() {
            [_, _, jid, _, mid] => Ok(EventKind::JobReturn { jid: *jid, mid: *mid }),
            _ => Err(TagError::MalformedReturnTag {
                tag: tag.to_string(),
                found: parts.len(),
            }),
        },
        _ => Ok(EventKind::Ignored),
    }
}
