pub mod once;
pub mod run;

use crate::collectors::config::InfluxConfig;

#[derive(Debug)]
pub enum Action {
    Run {
        port: u16,
        listen: Option<String>,
        config: InfluxConfig,
        collectors: Vec<String>,
    },
    Once {
        config: InfluxConfig,
        path: String,
    },
}
