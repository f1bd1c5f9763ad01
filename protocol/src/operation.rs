use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::ProtocolError;

/// The two membership mutations the relay knows how to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Remove,
}

impl Operation {
    pub fn all() -> &'static [Operation] {
        &[Operation::Add, Operation::Remove]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Remove => "remove",
        }
    }

    /// Type tag of the request message for this operation.
    pub fn request_type(self) -> &'static str {
        match self {
            Operation::Add => "YTQF_ADD_TO_PLAYLIST",
            Operation::Remove => "YTQF_REMOVE_FROM_PLAYLIST",
        }
    }

    /// Type tag of the response that answers [`Operation::request_type`].
    pub fn response_type(self) -> &'static str {
        match self {
            Operation::Add => "YTQF_ADD_RESULT",
            Operation::Remove => "YTQF_REMOVE_RESULT",
        }
    }

    pub fn from_request_type(tag: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|op| op.request_type() == tag)
    }

    pub fn from_response_type(tag: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|op| op.response_type() == tag)
    }

    /// The mutation that reverts this one.
    pub fn inverse(self) -> Self {
        match self {
            Operation::Add => Operation::Remove,
            Operation::Remove => Operation::Add,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Operation::Add),
            "remove" => Ok(Operation::Remove),
            other => Err(ProtocolError::UnknownOperation(other.to_string())),
        }
    }
}
