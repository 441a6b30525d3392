//! State shared by the handlers.

use crate::core::{ChatService, GigLifecycleManager, MilestoneEscrowEngine};

/// Managers shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    /// Gig lifecycle and applications
    pub gigs: GigLifecycleManager,
    /// Milestone review and payouts
    pub escrow: MilestoneEscrowEngine,
    /// Gig chat channels
    pub chats: ChatService,
}

impl AppState {
    /// Bundles the managers for the router.
    pub const fn new(
        gigs: GigLifecycleManager,
        escrow: MilestoneEscrowEngine,
        chats: ChatService,
    ) -> Self {
        Self {
            gigs,
            escrow,
            chats,
        }
    }
}
