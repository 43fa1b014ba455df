pub mod jobs;
#[cfg(test)]
mod tests;
pub use jobs::router;
