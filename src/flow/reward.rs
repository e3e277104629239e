use crate::catalog::RewardOffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardModal {
    Hidden,
    Shown,
    Closed,
}

/// Holds the session's pre-drawn reward and guards claiming it.
#[derive(Debug, Clone)]
pub struct RewardResolver {
    offer: RewardOffer,
    claimed: bool,
    modal: RewardModal,
    finished: bool,
}

impl RewardResolver {
    pub fn new(offer: RewardOffer) -> Self {
        Self {
            offer,
            claimed: false,
            modal: RewardModal::Hidden,
            finished: false,
        }
    }

    pub fn offer(&self) -> &RewardOffer {
        &self.offer
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed
    }

    pub fn modal(&self) -> RewardModal {
        self.modal
    }

    /// First call wins; later calls return `false`.
    pub fn claim(&mut self) -> bool {
        if self.claimed {
            return false;
        }
        self.claimed = true;
        self.modal = RewardModal::Shown;
        true
    }

    pub fn close_modal(&mut self) -> bool {
        if self.modal != RewardModal::Shown {
            return false;
        }
        self.modal = RewardModal::Closed;
        true
    }

    /// `true` exactly once, after the modal has been closed.
    pub fn finish(&mut self) -> bool {
        if self.modal != RewardModal::Closed || self.finished {
            return false;
        }
        self.finished = true;
        true
    }
}
