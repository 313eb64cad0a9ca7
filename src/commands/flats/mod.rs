pub mod create_flat_command;
pub mod update_payment_status_command;

pub use create_flat_command::{slugify_flat_id, CreateFlatCommand};
pub use update_payment_status_command::{PaymentStatus, UpdatePaymentStatusCommand};
