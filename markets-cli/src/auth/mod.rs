//! Admin authentication: credential cache, prompts and session setup.

pub mod credentials;
pub mod prompt;
pub mod session;

pub use credentials::{
    CredentialStore, FieldCipher, FileCredentialStore, MemoryCredentialStore, StoredCredentials,
};
pub use prompt::{Prompter, TerminalPrompter};
pub use session::{AdminCredentials, CredentialSource, Session, SessionManager};
