//! Per-link negotiation state

/// Negotiation progress of a single peer link
///
/// Tracks the description exchange with one peer. The side calling
/// `initiate_offer` walks the left branch, the side answering walks the
/// right one. Candidate intake is allowed in every state and never
/// transitions it.
///
/// ```text
/// [*] --> Registered: register()
/// Registered --> OfferSent: initiate_offer() emits the local offer
/// Registered --> AnswerSent: accept_offer() applies the remote offer
/// AnswerSent --> Negotiated: accept_offer() emits the local answer
/// OfferSent --> Negotiated: accept_answer() applies the remote answer
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum NegotiationState {
    /// Link created, no description exchanged yet
    #[default]
    Registered = 0,
    /// Local offer emitted, awaiting the remote answer
    OfferSent = 1,
    /// Remote offer applied, local answer being produced
    AnswerSent = 2,
    /// Both descriptions in place
    Negotiated = 3,
}

impl NegotiationState {
    /// Convert from u8 value
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Registered,
            1 => Self::OfferSent,
            2 => Self::AnswerSent,
            3 => Self::Negotiated,
            _ => Self::Registered,
        }
    }

    /// Check if no description has been exchanged yet
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered)
    }

    /// Check if a description exchange is underway
    pub fn is_negotiating(&self) -> bool {
        matches!(self, Self::OfferSent | Self::AnswerSent)
    }

    /// Check if both descriptions have been applied
    pub fn is_negotiated(&self) -> bool {
        matches!(self, Self::Negotiated)
    }
}
