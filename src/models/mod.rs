pub mod fulfillment;
pub mod image;
pub mod sale;

pub use fulfillment::{FulfillmentRequest, FulfillmentResponse};
pub use image::{ImageAsset, ImageListItem};
pub use sale::{RecordOutcome, Sale};
