use serde::{Deserialize, Deserializer, Serialize};

/// ICE candidate in the browser's `RTCIceCandidateInit` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_m_line_index: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
            username_fragment: None,
        }
    }

    pub fn with_mid(mut self, sdp_mid: impl Into<String>, sdp_m_line_index: u16) -> Self {
        self.sdp_mid = Some(sdp_mid.into());
        self.sdp_m_line_index = Some(sdp_m_line_index);
        self
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CandidateInit {
    candidate: String,
    #[serde(default)]
    sdp_mid: Option<String>,
    #[serde(default, rename = "sdpMLineIndex", alias = "sdpMlineIndex")]
    sdp_m_line_index: Option<u16>,
    #[serde(default)]
    username_fragment: Option<String>,
}

impl From<CandidateInit> for IceCandidate {
    fn from(init: CandidateInit) -> Self {
        Self {
            candidate: init.candidate,
            sdp_mid: init.sdp_mid,
            sdp_m_line_index: init.sdp_m_line_index,
            username_fragment: init.username_fragment,
        }
    }
}

// Клиенты присылают кандидата либо объектом, либо строкой: голой строкой
// "candidate:..." или JSON-объектом, сериализованным в строку.
#[derive(Deserialize)]
#[serde(untagged)]
enum CandidateRepr {
    Init(CandidateInit),
    Text(String),
}

impl<'de> Deserialize<'de> for IceCandidate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match CandidateRepr::deserialize(deserializer)? {
            CandidateRepr::Init(init) => Ok(init.into()),
            CandidateRepr::Text(text) if text.trim_start().starts_with('{') => {
                serde_json::from_str::<CandidateInit>(&text)
                    .map(Into::into)
                    .map_err(serde::de::Error::custom)
            }
            CandidateRepr::Text(text) => Ok(IceCandidate::new(text)),
        }
    }
}
