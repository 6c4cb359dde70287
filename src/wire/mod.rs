pub mod codec;
pub mod opcode;
pub mod packet;
pub mod request;
pub mod response;

pub use opcode::{RequestOp, ResponseOp};
pub use packet::Envelope;
pub use request::Request;
pub use response::{AudioRelay, Response};
