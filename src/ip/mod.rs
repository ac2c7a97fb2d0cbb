mod public;

pub use public::PublicIpFetcher;
