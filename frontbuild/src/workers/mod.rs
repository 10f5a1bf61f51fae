//! Job workers

pub mod fsm;
pub mod pipeline;
