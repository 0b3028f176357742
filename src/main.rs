use std::io::{self, BufRead, Write};

use dimex::Equation;

fn main() -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut eq = Equation::new();
    let mut buffer = String::new();
    loop {
        stdout.write_all(b"> ")?;
        stdout.flush()?;
        buffer.clear();
        if stdin.lock().read_line(&mut buffer)? == 0 {
            return Ok(());
        }
        let line = buffer.trim();
        if line.is_empty() {
            continue;
        }
        match eq.parse(line, &[]).and_then(|_| eq.evaluate(&[], true)) {
            Ok(ans) if ans.unit.is_empty() => println!("{}", ans.value),
            Ok(ans) => println!("{} {}", ans.value, ans.unit),
            Err(_) => eprintln!("{}", eq.error_message(Some(line))),
        }
    }
}
