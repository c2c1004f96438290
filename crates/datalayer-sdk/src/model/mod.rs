// Model types for Datalayer API responses

pub mod common;
pub mod environment;
pub mod iam;
pub mod runtime;
pub mod snapshot;
pub mod space;

pub use environment::{Environment, Resources};
pub use iam::{ApiToken, Credits, CreditsInfo, LoginResponse, Reservation, UpdateMe, User};
pub use runtime::{CreateRuntime, Runtime, RuntimeType};
pub use snapshot::{RuntimeSnapshot, UploadSnapshot};
pub use space::{CreateSpace, Item, ItemKind, Space};
