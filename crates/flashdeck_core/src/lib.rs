pub mod accounts;
pub mod domain;
pub mod grading;
pub mod memory;
pub mod navigator;
pub mod ports;
pub mod service;
pub mod stats;
pub mod token;
pub mod topics;

pub use accounts::{AccountService, AdminOutcome};
pub use domain::{
    CardCommand, CardDraft, CardId, CommandOutcome, DailyProgress, DraftMode, FlashCard,
    NavigationResult, NewCard, NewUser, Role, Side, User, UserCredentials, UserId,
};
pub use memory::InMemoryStore;
pub use ports::{AccountStore, AuthSessionStore, CardStore, PortError, PortResult};
pub use service::StudyService;
pub use token::{TokenCodec, NEXT_TOKEN};
pub use topics::{TopicAggregate, REVISION_TOPIC};
