pub mod connector;
pub mod credential;
pub mod doctor;
pub mod serve;
pub mod vault_cmd;
