mod consumable;
mod downcast;
mod upcast;

pub use consumable::*;
pub use downcast::*;
pub use upcast::*;
