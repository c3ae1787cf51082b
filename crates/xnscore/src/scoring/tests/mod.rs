mod analytics;
mod common;
mod decay;
mod router;
