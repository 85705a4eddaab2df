use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use convertino_core::route::CompressionLevel;
use convertino_core::ToolOptions;

#[derive(Parser, Debug)]
#[command(name = "convertino")]
#[command(version)]
#[command(about = "Batch file conversion: images, PDFs, office documents, audio and video")]
pub struct Cli {
    /// Configuration file (missing file means built-in defaults)
    #[arg(short, long, global = true, env = "CONVERTINO_CONFIG", default_value = "convertino.toml")]
    pub config: PathBuf,

    /// Output directory, overriding `output.dir`
    #[arg(short, long, global = true, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "CONVERTINO_VERBOSE")]
    pub verbose: bool,

    /// Print Prometheus metrics after the command finishes
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List smart-convert source formats and their targets
    Routes,

    /// List single-purpose tools
    Tools,

    /// Convert files from one source format to a target format
    Convert {
        /// Source format key (pdf, docx, pptx, xlsx, image, video, audio)
        #[arg(long)]
        from: String,

        /// Target format (defaults to the route's first target)
        #[arg(long)]
        to: Option<String>,

        /// Save all results as one ZIP archive
        #[arg(long)]
        zip: bool,

        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Run a single-purpose tool over files
    Tool {
        /// Tool id, e.g. image-resize or pdf-split (see `convertino tools`)
        id: String,

        /// Target format (defaults to the tool's first target)
        #[arg(long)]
        to: Option<String>,

        #[command(flatten)]
        options: ToolArgs,

        /// Save all results as one ZIP archive
        #[arg(long)]
        zip: bool,

        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Merge PDFs into one document, in the given order
    Merge {
        #[arg(value_name = "FILE", required = true, num_args = 2..)]
        files: Vec<PathBuf>,

        /// Output file name inside the output directory
        #[arg(short = 'n', long, default_value = "merged.pdf")]
        name: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ToolArgs {
    /// Encoder quality in (0, 1]
    #[arg(long, default_value_t = 0.85)]
    pub quality: f32,

    #[arg(long, default_value_t = 800)]
    pub width: u32,

    #[arg(long, default_value_t = 600)]
    pub height: u32,

    /// Stretch to exactly WIDTHxHEIGHT instead of fitting inside it
    #[arg(long)]
    pub no_keep_aspect: bool,

    /// First page for pdf-split (1-based)
    #[arg(long, default_value_t = 1)]
    pub start: u32,

    /// Last page for pdf-split (inclusive)
    #[arg(long, default_value_t = 1)]
    pub end: u32,

    /// Pages for pdf-extract-pages, e.g. "1,3,5"
    #[arg(long, value_delimiter = ',')]
    pub pages: Vec<u32>,

    /// Remote PDF compression level (screen, ebook, printer, prepress)
    #[arg(long, default_value = "ebook")]
    pub level: CompressionLevel,
}

impl From<ToolArgs> for ToolOptions {
    fn from(args: ToolArgs) -> Self {
        Self {
            quality: args.quality,
            width: args.width,
            height: args.height,
            keep_aspect: !args.no_keep_aspect,
            start_page: args.start,
            end_page: args.end,
            pages: args.pages,
            level: args.level,
        }
    }
}
