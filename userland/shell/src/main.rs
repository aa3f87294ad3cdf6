//! The bundled shell: the one user process this kernel ever runs. A
//! faithful port of the original `shell.c` — same prompt, same five
//! commands, same unknown-command message — onto this kernel's syscall
//! ABI.

#![no_std]
#![no_main]

mod start;
mod syscall;

use core::fmt::{self, Write};

const CMDLINE_MAX: usize = 128;

struct Console;

impl Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for &byte in s.as_bytes() {
            syscall::putchar(byte);
        }
        Ok(())
    }
}

macro_rules! print {
    ($($arg:tt)*) => {{
        let _ = write!(Console, $($arg)*);
    }};
}

macro_rules! println {
    () => { print!("\n") };
    ($($arg:tt)*) => {{
        print!($($arg)*);
        print!("\n");
    }};
}

fn shell_main() {
    loop {
        print!("> ");

        let mut cmdline = [0u8; CMDLINE_MAX];
        let mut len = 0usize;
        let too_long = loop {
            let ch = syscall::getchar() as u8;
            syscall::putchar(ch);

            if len == cmdline.len() - 1 {
                break true;
            }
            if ch == b'\r' {
                println!();
                cmdline[len] = 0;
                break false;
            }
            cmdline[len] = ch;
            len += 1;
        };

        if too_long {
            println!("[FAILED] Command line too long");
            continue;
        }

        let cmd = &cmdline[..len];

        if cmd == b"hello" {
            println!("Hello world from shell!");
        } else if cmd == b"readfile" {
            let mut buf = [0u8; 128];
            let n = syscall::readfile(b"hello.txt\0", &mut buf);
            if n < 0 {
                println!("-1");
            } else {
                let text = core::str::from_utf8(&buf[..n as usize]).unwrap_or("");
                println!("{}", text);
            }
        } else if cmd == b"writefile" {
            syscall::writefile(b"hello.txt\0", b"Hello from shell!\n");
        } else if cmd == b"shutdown" {
            syscall::shutdown();
        } else if cmd == b"exit" {
            syscall::exit();
        } else {
            let text = core::str::from_utf8(cmd).unwrap_or("?");
            println!("[FAILED] Unknown command: {}", text);
        }
    }
}

#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    syscall::exit();
}
