use recruit_board::app::{self, Command};

fn main() {
    let command = match app::parse_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };

    match command {
        Command::Version => println!("recruit-board {}", recruit_board::VERSION),
        Command::Help => println!("{}", app::HELP),
        Command::Run(opts) => {
            if let Err(err) = recruit_board::run(opts) {
                eprintln!("error: {err:?}");
                std::process::exit(1);
            }
        }
    }
}
