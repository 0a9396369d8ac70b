/// Opaque remote identifier of a single email.
pub type MessageId = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Metadata of one message, fetched on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDetail {
    pub id: MessageId,
    /// Headers in the order the message carries them.
    pub headers: Vec<Header>,
    pub snippet: String,
}

impl MessageDetail {
    /// First header with this name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn subject(&self) -> Option<&str> {
        self.header("Subject")
    }

    pub fn from(&self) -> Option<&str> {
        self.header("From")
    }
}
