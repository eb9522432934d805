//! End-to-end tests for the mapping engine, driven from the dumps under `test_data/`.

#[cfg(test)]
mod batch;
#[cfg(test)]
mod pipeline;
#[cfg(test)]
mod properties;
#[cfg(test)]
mod scenarios;
#[cfg(test)]
pub(crate) mod utils;
