#![allow(async_fn_in_trait)]
pub mod aoi;
pub mod cl;
pub mod config;
pub mod download;
pub mod error;
pub mod http;
pub mod paths;
pub mod pipeline;
pub mod search;
pub mod timing;
pub mod unpack;
