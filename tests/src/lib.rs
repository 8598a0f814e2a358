#![cfg(test)]

mod fake_db;
mod fake_provider;

mod lifecycle_scenarios;
mod pr_mode;
