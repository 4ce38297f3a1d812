use std::cell::Cell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{MessageEvent, WebSocket};

use crate::api::ws_url;
use crate::models::{WsChatRequest, WsEvent};

/// Opens a WebSocket for one chat turn, sends the request once connected, and
/// hands every server event to `on_event`. The socket closes itself after the
/// turn's last event; a connection lost earlier is reported as an error event.
pub fn start_streaming(request: WsChatRequest, on_event: impl Fn(WsEvent) + 'static) {
    let ws = match WebSocket::new(&ws_url()) {
        Ok(ws) => ws,
        Err(e) => {
            on_event(WsEvent::Error { message: format!("Failed to connect: {e:?}") });
            return;
        }
    };
    ws.set_binary_type(web_sys::BinaryType::Arraybuffer);

    let on_event = Rc::new(on_event);
    let finished = Rc::new(Cell::new(false));

    // --- onopen: send the chat request ---
    let ws_open = ws.clone();
    let onopen = Closure::<dyn Fn()>::new(move || {
        if let Ok(json) = serde_json::to_string(&request) {
            let _ = ws_open.send_with_str(&json);
        }
    });
    ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));
    onopen.forget();

    // --- onmessage: dispatch WsEvent ---
    let ws_message = ws.clone();
    let message_handler = on_event.clone();
    let message_finished = finished.clone();
    let onmessage = Closure::<dyn Fn(MessageEvent)>::new(move |ev: MessageEvent| {
        let Some(text) = ev.data().as_string() else {
            return;
        };
        let event = serde_json::from_str::<WsEvent>(&text)
            .unwrap_or_else(|e| WsEvent::Error { message: format!("Parse error: {e}") });
        let last = matches!(
            event,
            WsEvent::StreamEnd { .. } | WsEvent::Rejected { .. } | WsEvent::Error { .. }
        );
        message_handler(event);
        if last {
            message_finished.set(true);
            let _ = ws_message.close();
        }
    });
    ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
    onmessage.forget();

    // --- onerror ---
    let onerror = Closure::<dyn Fn()>::new(move || {
        log::error!("WebSocket connection error");
    });
    ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));
    onerror.forget();

    // --- onclose: release the view if the turn never finished ---
    let onclose = Closure::<dyn Fn()>::new(move || {
        if !finished.replace(true) {
            on_event(WsEvent::Error {
                message: "Connection closed before the reply finished".to_string(),
            });
        }
    });
    ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));
    onclose.forget();
}
