mod common;
mod results;
mod service;
