#![forbid(unsafe_code)]

//! One-shot bridge from DOM success/failure callbacks to a future.

use std::cell::RefCell;
use std::rc::Rc;

use futures::channel::oneshot;
use js_sys::Function;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

type Slot = Rc<RefCell<Option<oneshot::Sender<bool>>>>;

/// Pair of callbacks where the first one to fire decides the outcome.
///
/// Callers register [`ok`](Self::ok) and [`err`](Self::err) on the target,
/// await [`wait`](Self::wait), then unregister both before dropping this
/// value. Dropping while still registered makes a late event call into a
/// freed closure.
pub(crate) struct Settle {
    receiver: oneshot::Receiver<bool>,
    on_ok: Closure<dyn FnMut(web_sys::Event)>,
    on_err: Closure<dyn FnMut(web_sys::Event)>,
}

impl Settle {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = oneshot::channel();
        let slot: Slot = Rc::new(RefCell::new(Some(sender)));
        Self {
            receiver,
            on_ok: resolver(Rc::clone(&slot), true),
            on_err: resolver(slot, false),
        }
    }

    pub(crate) fn ok(&self) -> &Function {
        self.on_ok.as_ref().unchecked_ref()
    }

    pub(crate) fn err(&self) -> &Function {
        self.on_err.as_ref().unchecked_ref()
    }

    /// `true` if the success callback fired first.
    pub(crate) async fn wait(&mut self) -> bool {
        (&mut self.receiver).await.unwrap_or(false)
    }
}

fn resolver(slot: Slot, outcome: bool) -> Closure<dyn FnMut(web_sys::Event)> {
    Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
        if let Some(sender) = slot.borrow_mut().take() {
            let _ = sender.send(outcome);
        }
    })
}
