mod session;

use std::io::{self, BufRead, Write};

use session::Session;

fn main() -> io::Result<()> {
    env_logger::init();

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut session = Session::new();
    let mut line = String::new();

    writeln!(
        writer,
        "Wheel Tracker Emulator ready. Type `help` for commands or `exit` to quit."
    )?;
    for banner in session.banner() {
        writeln!(writer, "{banner}")?;
    }

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

        let (responses, terminate) = session.handle_command(trimmed);
        for response in responses {
            writeln!(writer, "{response}")?;
        }
        if terminate {
            writeln!(writer, "Session closed.")?;
            break;
        }
    }

    Ok(())
}
