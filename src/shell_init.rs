//! `wt init <shell>` code generation.
//!
//! Each template is a single static string with one substitution point (the
//! binary name), generated with plain `format!` — pulling in a template
//! engine for one placeholder would be a premature abstraction.

use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
}

/// The binary name the generated wrapper function shadows and delegates to.
const BIN_NAME: &str = "wt";

/// Emit the shell function source for `shell` that intercepts `wt switch`
/// and `wt create --switch/-s` to `cd` the caller's interactive shell into
/// the resulting path, passing every other invocation straight through to
/// the real binary.
pub fn generate(shell: Shell) -> String {
    match shell {
        Shell::Bash | Shell::Zsh => posix_function(),
        Shell::Fish => fish_function(),
    }
}

fn posix_function() -> String {
    format!(
        r#"{bin}() {{
  if [ "$1" = "switch" ] && [ -n "$2" ]; then
    local __wt_path
    __wt_path=$(command {bin} info "$2" --field path) || return $?
    cd -- "$__wt_path"
    return 0
  fi

  if [ "$1" = "create" ]; then
    local __wt_switch=0
    local __wt_arg
    for __wt_arg in "$@"; do
      case "$__wt_arg" in
        --switch|-s) __wt_switch=1 ;;
      esac
    done
    if [ "$__wt_switch" = 1 ]; then
      local __wt_path
      __wt_path=$(command {bin} "$@") || return $?
      cd -- "$__wt_path"
      return 0
    fi
  fi

  command {bin} "$@"
}}
"#,
        bin = BIN_NAME,
    )
}

fn fish_function() -> String {
    format!(
        r#"function {bin}
    if test "$argv[1]" = "switch" -a -n "$argv[2]"
        set -l __wt_path (command {bin} info $argv[2] --field path)
        or return $status
        cd $__wt_path
        return 0
    end

    if test "$argv[1]" = "create"
        if contains -- --switch $argv; or contains -- -s $argv
            set -l __wt_path (command {bin} $argv)
            or return $status
            cd $__wt_path
            return 0
        end
    end

    command {bin} $argv
end
"#,
        bin = BIN_NAME,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bash_function_intercepts_switch_and_passes_through_otherwise() {
        let script = generate(Shell::Bash);
        assert!(script.contains("switch"));
        assert!(script.contains("command wt \"$@\""));
    }

    #[test]
    fn fish_function_uses_fish_syntax() {
        let script = generate(Shell::Fish);
        assert!(script.starts_with("function wt"));
        assert!(script.contains("end"));
    }

    #[test]
    fn zsh_shares_the_posix_template() {
        assert_eq!(generate(Shell::Zsh), generate(Shell::Bash));
    }
}
