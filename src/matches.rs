use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::jobs::{JobKind, JobPayload, Priority};
use crate::player::{PlayerProfile, ProfileJoin};

/// Where a match stands with respect to replay parsing.
///
/// Stored as an optional integer: absent means nobody decided yet, `0` means
/// parsing was explicitly requested and `2` means the replay is fully parsed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    #[default]
    Undecided,
    RequestedForParsing,
    FullyParsed,
}

#[derive(Serialize_repr, Deserialize_repr)]
#[repr(u8)]
enum StatusCode {
    Requested = 0,
    Parsed = 2,
}

impl ParseStatus {
    pub fn is_undecided(&self) -> bool {
        *self == ParseStatus::Undecided
    }

    fn code(self) -> Option<StatusCode> {
        match self {
            ParseStatus::Undecided => None,
            ParseStatus::RequestedForParsing => Some(StatusCode::Requested),
            ParseStatus::FullyParsed => Some(StatusCode::Parsed),
        }
    }

    /// Status to persist when `incoming` is written over a stored record.
    /// An undecided incoming status never clears an existing decision.
    pub fn merge(stored: ParseStatus, incoming: ParseStatus) -> ParseStatus {
        match incoming {
            ParseStatus::Undecided => stored,
            decided => decided,
        }
    }
}

impl Serialize for ParseStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.code().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ParseStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<StatusCode>::deserialize(deserializer)? {
            None => ParseStatus::Undecided,
            Some(StatusCode::Requested) => ParseStatus::RequestedForParsing,
            Some(StatusCode::Parsed) => ParseStatus::FullyParsed,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub match_id: u64,
    #[serde(default, skip_serializing_if = "ParseStatus::is_undecided")]
    pub parse_status: ParseStatus,
    /// A user is waiting on this match right now
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub request: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    #[serde(default)]
    pub players: Vec<PlayerInMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_data: Option<Value>,
    /// Everything else the match record carries, kept as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Match {
    pub fn new(match_id: u64) -> Self {
        Self {
            match_id,
            parse_status: ParseStatus::Undecided,
            request: false,
            priority: None,
            attempts: None,
            players: Vec::new(),
            parsed_data: None,
            extra: Map::new(),
        }
    }

    pub fn is_fully_parsed(&self) -> bool {
        self.parse_status == ParseStatus::FullyParsed
    }
}

impl JobPayload for Match {
    fn title(&self, kind: JobKind) -> String {
        format!("{} {}", kind, self.match_id)
    }

    fn attempts(&self) -> Option<u32> {
        self.attempts
    }

    fn priority(&self) -> Option<Priority> {
        self.priority
    }
}

/// One player's performance record inside a match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<u32>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ProfileJoin for PlayerInMatch {
    fn account_id(&self) -> Option<u32> {
        self.account_id
    }

    fn merge_profile(&mut self, profile: &PlayerProfile) {
        profile.merge_into(&mut self.fields);
    }
}
