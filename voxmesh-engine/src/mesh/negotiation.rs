use crate::transport::SignalingState;
use voxmesh_core::SdpType;

/// Per-link perfect-negotiation flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NegotiationState {
    /// An offer of ours is being created or sent.
    pub making_offer: bool,
    /// The last remote offer collided with ours and was dropped.
    pub ignore_offer: bool,
    /// A remote answer is being applied.
    pub is_setting_remote_answer_pending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionVerdict {
    /// Impolite side keeps its own offer; the remote one is dropped unanswered.
    Ignore,
    /// Apply the description, rolling back our pending offer first if asked.
    Apply { rollback: bool },
}

impl NegotiationState {
    pub fn offer_collision(&self, kind: SdpType, signaling: SignalingState) -> bool {
        let ready_for_offer = !self.making_offer
            && (signaling == SignalingState::Stable || self.is_setting_remote_answer_pending);
        kind == SdpType::Offer && !ready_for_offer
    }

    /// Decides what to do with an incoming description and records whether
    /// it was ignored.
    pub fn on_remote_description(
        &mut self,
        kind: SdpType,
        polite: bool,
        signaling: SignalingState,
    ) -> DescriptionVerdict {
        let collision = self.offer_collision(kind, signaling);
        self.ignore_offer = !polite && collision;

        if self.ignore_offer {
            DescriptionVerdict::Ignore
        } else {
            DescriptionVerdict::Apply {
                rollback: collision,
            }
        }
    }
}
