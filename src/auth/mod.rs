// Two-step challenge-response exchange against the access-control gateway.

pub mod protocol;
