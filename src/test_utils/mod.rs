mod logging_env;

pub(crate) mod sim;
