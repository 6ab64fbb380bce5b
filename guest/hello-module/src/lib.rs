use wasmflow_guest::{Failure, Info, LogLevel, Payload, complete, fail, write_log};

#[unsafe(no_mangle)]
pub extern "C" fn run() {
  let info = match Info::load() {
    Ok(info) => info,
    Err(e) => {
      fail(Failure::new(format!("bad run info: {e}"), "InvalidInfo").non_retryable());
      return;
    }
  };

  let name = match info.params.first() {
    Some(param) => match param.decode_json::<String>() {
      Ok(name) => name,
      Err(e) => {
        fail(Failure::new(e.to_string(), "InvalidParam").non_retryable());
        return;
      }
    },
    None => "world".to_string(),
  };
  write_log(LogLevel::Info, &format!("greeting {name}"));

  match Payload::json(&format!("hello, {name}")) {
    Ok(greeting) => complete(vec![greeting]),
    Err(e) => fail(Failure::new(e.to_string(), "EncodeError")),
  }
}
