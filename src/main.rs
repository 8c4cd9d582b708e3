// src/main.rs

use dagmaster::errors::MasterStatus;
use dagmaster::{cli, logging, run};

#[tokio::main]
async fn main() {
    let args = cli::parse();
    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("dagmaster error: {err:?}");
        std::process::exit(MasterStatus::InternalError.code());
    }

    match run(args).await {
        Ok(_) => {
            eprintln!(
                "Master finished with code {}: Success",
                MasterStatus::Success.code()
            );
        }
        Err(err) => {
            let code = err.status().code();
            eprintln!("Master aborted with code {code}: {err}");
            std::process::exit(code);
        }
    }
}
