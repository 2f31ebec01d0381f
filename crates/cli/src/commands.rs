use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Write one or more CSV files into the configured table
    Write {
        #[arg(help = "CSV files to ingest in order, or '-' for standard input")]
        inputs: Vec<String>,

        #[arg(long, help = "Read the CSV from standard input", conflicts_with = "inputs")]
        stdin: bool,

        #[arg(long, help = "Rows per batch, overrides the config file")]
        batch_size: Option<usize>,

        #[arg(long, help = "Encode and batch the input without connecting")]
        dry_run: bool,

        #[arg(
            long,
            help = "Abort on the first rejected record or failed batch, skipping later files"
        )]
        stop_on_first_error: bool,

        #[arg(
            long,
            help = "If specified, writes the JSON report to this file instead of stdout"
        )]
        output: Option<String>,
    },
    /// Read rows back by key and compare them with a CSV file
    Validate {
        #[arg(help = "Reference CSV file, or '-' for standard input")]
        input: String,

        #[arg(
            long,
            value_delimiter = ',',
            help = "Key columns to look rows up by (defaults to the table primary key)"
        )]
        key: Vec<String>,

        #[arg(long, help = "Maximum concurrent point reads")]
        concurrency: Option<usize>,

        #[arg(
            long,
            help = "If specified, writes the JSON report to this file instead of stdout"
        )]
        output: Option<String>,
    },
    /// Generate a CSV test file with columns colid, cola, colb, colc
    Generate {
        #[arg(long, help = "Number of data rows")]
        rows: usize,

        #[arg(long, help = "Use ids 0..rows instead of random ids")]
        sequential: bool,

        #[arg(long, help = "Seed for reproducible output")]
        seed: Option<u64>,

        #[arg(long, help = "Output file (defaults to stdout)")]
        output: Option<String>,
    },
    /// Print the table schema used for encoding
    Schema {
        #[arg(
            long,
            help = "If specified, writes the JSON schema to this file instead of stdout"
        )]
        output: Option<String>,
    },
}
