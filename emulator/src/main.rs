use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use tach_core::scripts::ScriptKind;
use tach_core::trace::TraceCapacity;
use tach_emulator::bench::BenchConfig;
use tach_emulator::check::check_dump;
use tach_emulator::session::{Session, SessionOptions};

const USAGE: &str = "Usage: tach-emulator [--dump] [--plot] [--transcript <path>] [--script <name>]
       tach-emulator --check <path>";

struct Args {
    options: SessionOptions,
    script: Option<ScriptKind>,
    check: Option<PathBuf>,
}

fn main() -> io::Result<()> {
    let args = parse_args().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    if let Some(path) = args.check {
        return check(&path);
    }

    let mut session = Session::new(TraceCapacity::default(), BenchConfig::default(), args.options)?;
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    if let Some(kind) = args.script {
        for response in session.handle_command(&format!("run {}", kind.name()))? {
            writeln!(writer, "{response}")?;
        }
        return Ok(());
    }

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut line = String::new();

    writeln!(
        writer,
        "Tach bench emulator ready. Type `help` for commands or `exit` to quit."
    )?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        for response in session.handle_command(trimmed)? {
            writeln!(writer, "{response}")?;
        }
    }

    Ok(())
}

fn check(path: &Path) -> io::Result<()> {
    let text = fs::read_to_string(path)?;
    let lines = check_dump(&text, BenchConfig::default().capture_clock_hz).map_err(|err| {
        io::Error::new(io::ErrorKind::InvalidData, format!("{}: {err}", path.display()))
    })?;

    let stdout = io::stdout();
    let mut writer = stdout.lock();
    for line in lines {
        writeln!(writer, "{line}")?;
    }
    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_args() -> Result<Args, String> {
    let mut parsed = Args {
        options: SessionOptions::default(),
        script: None,
        check: None,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dump" => parsed.options.full_dump = true,
            "--plot" => parsed.options.plot = true,
            "--transcript" => {
                let path = args
                    .next()
                    .ok_or_else(|| "Expected a path after --transcript".to_string())?;
                parsed.options.transcript = Some(PathBuf::from(path));
            }
            "--script" => {
                let name = args
                    .next()
                    .ok_or_else(|| "Expected a script name after --script".to_string())?;
                let kind = ScriptKind::from_name(&name)
                    .ok_or_else(|| format!("Unknown script `{name}`"))?;
                parsed.script = Some(kind);
            }
            "--check" => {
                let path = args
                    .next()
                    .ok_or_else(|| "Expected a dump file after --check".to_string())?;
                parsed.check = Some(PathBuf::from(path));
            }
            other => return Err(format!("Unexpected argument `{other}`")),
        }
    }

    Ok(parsed)
}
