//! Minimal shell-text splitting.
//!
//! Not a shell parser: quotes group words, and `;`, `|`, `&` and newlines
//! end a simple command. Enough to find `git push` or `pip install` at any
//! position in a chained or piped command line. `all_commands` also
//! descends into `sh -c` scripts and `$(...)`/backtick substitutions.

const WRAPPERS: &[&str] = &["sudo", "env", "time", "nohup", "exec", "command", "xargs"];

const SHELLS: &[&str] = &["bash", "sh", "zsh", "dash", "ksh"];

/// Nesting limit for `sh -c` and substitution descent.
const MAX_DEPTH: usize = 4;

/// Wrapper options that consume the following word.
fn wrapper_value_flags(wrapper: &str) -> &'static [&'static str] {
    match wrapper {
        "sudo" => &["-u", "-g", "-C", "-D", "-p", "-r", "-t", "-T", "-U", "-R"],
        "env" => &["-u", "-C", "-S"],
        "time" => &["-f", "-o"],
        "exec" => &["-a"],
        "xargs" => &["-I", "-n", "-P", "-L", "-d", "-E", "-s", "-a"],
        _ => &[],
    }
}

/// Split `command` into simple commands, each a list of words.
pub fn simple_commands(command: &str) -> Vec<Vec<String>> {
    let mut commands: Vec<Vec<String>> = Vec::new();
    let mut words: Vec<String> = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = command.chars().peekable();

    fn end_word(words: &mut Vec<String>, word: &mut String, in_word: &mut bool) {
        if *in_word {
            words.push(std::mem::take(word));
            *in_word = false;
        }
    }

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                for q in chars.by_ref() {
                    if q == '\'' {
                        break;
                    }
                    word.push(q);
                }
            }
            '"' => {
                in_word = true;
                while let Some(q) = chars.next() {
                    match q {
                        '"' => break,
                        '\\' => {
                            if let Some(&next) = chars.peek()
                                && matches!(next, '"' | '\\' | '$' | '`')
                            {
                                word.push(next);
                                chars.next();
                            } else {
                                word.push('\\');
                            }
                        }
                        _ => word.push(q),
                    }
                }
            }
            '\\' => {
                in_word = true;
                if let Some(next) = chars.next() {
                    word.push(next);
                }
            }
            ';' | '|' | '&' | '\n' => {
                end_word(&mut words, &mut word, &mut in_word);
                if !words.is_empty() {
                    commands.push(std::mem::take(&mut words));
                }
            }
            c if c.is_whitespace() => end_word(&mut words, &mut word, &mut in_word),
            _ => {
                in_word = true;
                word.push(c);
            }
        }
    }
    end_word(&mut words, &mut word, &mut in_word);
    if !words.is_empty() {
        commands.push(words);
    }
    commands
}

/// Every simple command in `command`, including those inside `bash -c`
/// arguments and `$(...)` or backtick substitutions.
pub fn all_commands(command: &str) -> Vec<Vec<String>> {
    let mut out = Vec::new();
    collect(command, 0, &mut out);
    out
}

fn collect(command: &str, depth: usize, out: &mut Vec<Vec<String>>) {
    if depth > MAX_DEPTH {
        return;
    }
    for words in simple_commands(command) {
        if let Some(script) = shell_script(&words) {
            collect(script, depth + 1, out);
        }
        out.push(words);
    }
    for body in substitutions(command) {
        collect(&body, depth + 1, out);
    }
}

/// The script argument of `bash -c '...'` (also `-lc`, `-ec`).
fn shell_script(words: &[String]) -> Option<&str> {
    let words = program_words(words);
    if !SHELLS.contains(&program_name(words.first()?)) {
        return None;
    }
    let mut i = 1;
    while let Some(w) = words.get(i) {
        if w == "-o" || w == "+o" {
            i += 2;
            continue;
        }
        if w.starts_with("--") {
            i += 1;
            continue;
        }
        if !w.starts_with('-') {
            return None;
        }
        if w[1..].contains('c') {
            return words.get(i + 1).map(String::as_str);
        }
        i += 1;
    }
    None
}

/// Bodies of `$(...)` and backtick substitutions outside single quotes.
/// Nested substitutions stay inside their enclosing body.
pub fn substitutions(command: &str) -> Vec<String> {
    let chars: Vec<char> = command.chars().collect();
    let mut out = Vec::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_single {
            if c == '\'' {
                in_single = false;
            }
            i += 1;
            continue;
        }
        match c {
            '\\' => i += 1,
            '\'' if !in_double => in_single = true,
            '"' => in_double = !in_double,
            '$' if chars.get(i + 1) == Some(&'(') => {
                let start = i + 2;
                let mut depth = 1;
                let mut j = start;
                while j < chars.len() {
                    match chars[j] {
                        '(' => depth += 1,
                        ')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    j += 1;
                }
                out.push(chars[start..j].iter().collect());
                i = j;
            }
            '`' => {
                let start = i + 1;
                let mut j = start;
                while j < chars.len() && chars[j] != '`' {
                    if chars[j] == '\\' {
                        j += 1;
                    }
                    j += 1;
                }
                let end = j.min(chars.len());
                out.push(chars[start..end].iter().collect());
                i = j;
            }
            _ => {}
        }
        i += 1;
    }
    out
}

/// Strip leading `VAR=value` assignments and wrappers such as `sudo`,
/// together with the wrapper's own options (`sudo -u deploy`).
pub fn program_words(words: &[String]) -> &[String] {
    let mut start = 0;
    let mut wrapper: Option<&str> = None;
    while let Some(w) = words.get(start) {
        if let Some(wr) = wrapper
            && w.starts_with('-')
        {
            if w == "--" {
                wrapper = None;
                start += 1;
            } else if wrapper_value_flags(wr).contains(&w.as_str()) {
                start += 2;
            } else {
                start += 1;
            }
            continue;
        }
        let is_assignment = !w.starts_with('-') && w.contains('=');
        if is_assignment {
            start += 1;
        } else if WRAPPERS.contains(&w.as_str()) {
            wrapper = Some(w.as_str());
            start += 1;
        } else {
            break;
        }
    }
    words.get(start..).unwrap_or(&[])
}

/// Basename of a program word (`/usr/bin/git` → `git`).
pub fn program_name(word: &str) -> &str {
    word.rsplit('/').next().unwrap_or(word)
}
