//! On-chain parameter and block-height caches.
//!
//! Both caches gate the voting cadence of the external broadcast
//! client: [`ParamCache`] invalidates cached oracle parameters after a
//! fixed block interval (or on height regression), and
//! [`ChainHeightCache`] keeps the latest observed block height fresh
//! with an owner-cancelable background task.

pub mod error;
pub mod height;
pub mod param_cache;

pub use error::{ChainError, ChainResult};
pub use height::{
    ChainHeightCache, HeightSource, RpcHeightSource, DEFAULT_HEIGHT_POLL_INTERVAL,
};
pub use param_cache::{OracleParams, ParamCache, ParamsSource, PARAMS_CACHE_INTERVAL};
