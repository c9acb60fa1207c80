//! Output to the local operator or user.

/// Where the interpreters send human-readable text.
pub trait Console {
    fn display(&self, message: &str);
}

impl<C: Console + ?Sized> Console for &C {
    fn display(&self, message: &str) {
        (**self).display(message)
    }
}

impl<C: Console + ?Sized> Console for std::sync::Arc<C> {
    fn display(&self, message: &str) {
        (**self).display(message)
    }
}

/// Prints each message on its own line as `> message`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutConsole;

impl Console for StdoutConsole {
    fn display(&self, message: &str) {
        println!("> {message}");
    }
}
