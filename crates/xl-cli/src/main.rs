mod cli;
mod driver;
mod dump;

#[cfg(test)]
mod cli_tests;

use cli::Params;

fn main() {
    let matches = cli::build_cli().get_matches();
    let params = Params::from_matches(&matches);
    let mut out = std::io::stdout();
    let mut err = std::io::stderr();
    let code = driver::run(params, &mut out, &mut err);
    std::process::exit(code);
}
