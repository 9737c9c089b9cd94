use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "vacscope", about = "Vacancy collection and analytics engine")]
pub struct Config {
    /// Path to the SQLite database file
    #[arg(long, env = "DATABASE_PATH", default_value = "data/vacscope.db")]
    pub database_path: String,

    /// Base URL of the HH.ru API
    #[arg(long, env = "HH_BASE_URL", default_value = "https://api.hh.ru")]
    pub hh_base_url: String,

    /// User-Agent sent to the HH.ru API (it rejects anonymous clients)
    #[arg(long, env = "HH_USER_AGENT", default_value = "vacscope/0.1 (vacscope@example.com)")]
    pub hh_user_agent: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HH_TIMEOUT", default_value = "10")]
    pub hh_timeout_secs: u64,

    /// Maximum requests per second against the HH.ru API
    #[arg(long, env = "HH_REQUESTS_PER_SECOND", default_value = "2.0")]
    pub hh_requests_per_second: f64,

    /// Minimum token length for keyword extraction
    #[arg(long, env = "MIN_TOKEN_LEN", default_value = "3")]
    pub min_token_len: usize,

    /// Keywords seen in fewer vacancies than this are dropped from the ranking
    #[arg(long, env = "MIN_KEYWORD_FREQUENCY", default_value = "2")]
    pub min_keyword_frequency: u64,

    /// How many keywords the report ranks
    #[arg(long, env = "TOP_KEYWORDS", default_value = "20")]
    pub top_keywords: usize,

    /// How many skills the report ranks
    #[arg(long, env = "TOP_SKILLS", default_value = "15")]
    pub top_skills: usize,

    /// Extra stopwords for keyword extraction, comma separated
    #[arg(long, env = "EXTRA_STOP_WORDS", value_delimiter = ',')]
    pub extra_stop_words: Vec<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the web server (default when no subcommand given)
    Serve {
        /// Listen address
        #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
        listen_addr: String,
    },
    /// Run a single collection from the command line and exit
    Collect {
        /// Search query text
        #[arg(long)]
        query: String,

        /// HH.ru area id (1 Moscow, 2 St. Petersburg, 113 Russia)
        #[arg(long)]
        area: Option<u32>,

        /// HH.ru experience id (e.g. between1And3)
        #[arg(long)]
        experience: Option<String>,

        /// Maximum number of result pages to fetch
        #[arg(long, default_value = "10")]
        max_pages: u32,

        /// Items per page (HH.ru caps this at 100)
        #[arg(long, default_value = "20")]
        per_page: u32,

        /// Collect into a fresh project with this name instead of the default
        #[arg(long)]
        project_name: Option<String>,
    },
}

impl Config {
    /// Resolve the command, defaulting to Serve if none specified.
    pub fn resolved_command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve {
            listen_addr: std::env::var("LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        })
    }
}
