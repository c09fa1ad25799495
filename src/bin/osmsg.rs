use std::{
    error::Error,
    io::{self, Write},
    process::ExitCode,
};

use clap::{ArgAction, ArgGroup, Parser};
use fbtoys::{
    logging,
    mailbox::{self, KernelMailbox, Mailbox},
};

#[derive(Parser, Debug)]
#[clap(name = "osmsg", about = "Send and receive short messages between users")]
#[clap(group(ArgGroup::new("action").required(true).args(&["send", "receive"])))]
struct Args {
    /// Send MESSAGE to RECIPIENT
    #[clap(short, long, number_of_values = 2, value_names = &["RECIPIENT", "MESSAGE"])]
    send: Option<Vec<String>>,
    /// Print every pending message, removing it from the mailbox
    #[clap(short, long)]
    receive: bool,
    /// Current user
    #[clap(short, long, env = "USER")]
    user: String,
    /// More log output, repeat for more detail
    #[clap(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn send(
    mailbox: &mut impl Mailbox,
    out: &mut impl Write,
    pairs: &[String],
    from: &str,
) -> Result<(), Box<dyn Error>> {
    for pair in pairs.chunks_exact(2) {
        let (to, body) = (&pair[0], &pair[1]);
        mailbox.send(to, body, from)?;
        writeln!(out, "Message sent to {}.", to)?;
    }
    Ok(())
}

fn receive(
    mailbox: &mut impl Mailbox,
    out: &mut impl Write,
    user: &str,
) -> Result<(), Box<dyn Error>> {
    let messages = mailbox::drain(mailbox, user)?;
    if messages.is_empty() {
        writeln!(out, "No messages.")?;
    }
    for message in messages {
        writeln!(out, "{} said: {}", message.from, message.body)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    let mut mailbox = KernelMailbox;
    let mut out = io::stdout().lock();
    let result = match &args.send {
        Some(pairs) => send(&mut mailbox, &mut out, pairs, &args.user),
        None => receive(&mut mailbox, &mut out, &args.user),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("osmsg: {}", error);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use fbtoys::mailbox::MockMailbox;

    use super::*;

    fn output(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn parses_send() {
        let args =
            Args::try_parse_from(["osmsg", "--user", "alice", "-s", "bob", "hello there"]).unwrap();
        assert_eq!(
            args.send,
            Some(vec!["bob".to_owned(), "hello there".to_owned()])
        );
        assert!(!args.receive);
        assert_eq!(args.user, "alice");
    }

    #[test]
    fn parses_receive() {
        let args = Args::try_parse_from(["osmsg", "--user", "bob", "-r"]).unwrap();
        assert!(args.receive);
        assert_eq!(args.send, None);
    }

    #[test]
    fn malformed_arguments_are_rejected() {
        for argv in [
            vec!["osmsg", "--user", "bob"],
            vec!["osmsg", "--user", "bob", "-s", "alice"],
            vec!["osmsg", "--user", "bob", "-r", "-s", "alice", "hi"],
            vec!["osmsg", "--user", "bob", "-x"],
        ] {
            assert!(Args::try_parse_from(argv.clone()).is_err(), "{:?}", argv);
        }
    }

    #[test]
    fn send_then_receive_prints_sender_and_body() {
        let mut mailbox = MockMailbox::new();
        let mut out = Vec::new();
        send(
            &mut mailbox,
            &mut out,
            &["bob".to_owned(), "hello".to_owned()],
            "alice",
        )
        .unwrap();
        assert_eq!(output(out), "Message sent to bob.\n");

        let mut out = Vec::new();
        receive(&mut mailbox, &mut out, "bob").unwrap();
        assert_eq!(output(out), "alice said: hello\n");

        let mut out = Vec::new();
        receive(&mut mailbox, &mut out, "bob").unwrap();
        assert_eq!(output(out), "No messages.\n");
    }

    #[test]
    fn receive_prints_every_pending_message_in_order() {
        let mut mailbox = MockMailbox::new();
        mailbox.send("bob", "first", "alice").unwrap();
        mailbox.send("bob", "second", "carol").unwrap();

        let mut out = Vec::new();
        receive(&mut mailbox, &mut out, "bob").unwrap();
        assert_eq!(output(out), "alice said: first\ncarol said: second\n");
    }

    #[test]
    fn send_failure_is_an_error_and_prints_nothing() {
        let mut mailbox = MockMailbox::new();
        let mut out = Vec::new();
        let long_body = "x".repeat(mailbox::MAX_MESSAGE_LEN + 1);
        let result = send(&mut mailbox, &mut out, &["bob".to_owned(), long_body], "alice");
        assert!(result.is_err());
        assert!(out.is_empty());
        assert_eq!(mailbox.pending("bob"), 0);
    }
}
