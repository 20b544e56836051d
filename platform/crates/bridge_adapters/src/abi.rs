use crate::error::{AdapterResult, BridgeError};
use ethers_core::abi::{Abi, AbiParser, Event, Function, Log as DecodedLog, RawLog, Token};
use ethers_core::types::{Bytes, Log};

fn parse(signature: &str) -> AdapterResult<Abi> {
    AbiParser::default()
        .parse_str(signature)
        .map_err(|e| BridgeError::Abi(format!("{signature}: {e}")))
}

pub(crate) fn function(signature: &str) -> AdapterResult<Function> {
    parse(signature)?
        .functions()
        .next()
        .cloned()
        .ok_or_else(|| BridgeError::Abi(format!("no function in {signature}")))
}

pub(crate) fn event(signature: &str) -> AdapterResult<Event> {
    parse(signature)?
        .events()
        .next()
        .cloned()
        .ok_or_else(|| BridgeError::Abi(format!("no event in {signature}")))
}

pub(crate) fn encode_call(signature: &str, args: &[Token]) -> AdapterResult<Bytes> {
    Ok(Bytes::from(function(signature)?.encode_input(args)?))
}

pub(crate) fn decode_return(signature: &str, data: &[u8]) -> AdapterResult<Vec<Token>> {
    Ok(function(signature)?.decode_output(data)?)
}

pub(crate) fn decode_log(event: &Event, log: &Log) -> AdapterResult<DecodedLog> {
    let raw = RawLog {
        topics: log.topics.clone(),
        data: log.data.to_vec(),
    };
    Ok(event.parse_log(raw)?)
}

pub(crate) fn param(log: &DecodedLog, name: &str) -> AdapterResult<Token> {
    log.params
        .iter()
        .find(|p| p.name == name)
        .map(|p| p.value.clone())
        .ok_or_else(|| BridgeError::Abi(format!("log is missing field {name}")))
}
