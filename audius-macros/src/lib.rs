use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, LitStr};

/// Decodes `0x`-prefixed or bare 40 digit hex into the 20 address bytes.
fn address_bytes(literal: &str) -> Result<Vec<u8>, String> {
    let digits = literal
        .strip_prefix("0x")
        .or_else(|| literal.strip_prefix("0X"))
        .unwrap_or(literal);
    if digits.len() != 40 {
        return Err(format!("expected 40 hex digits, found {}", digits.len()));
    }

    let nibbles = digits
        .chars()
        .map(|c| c.to_digit(16).map(|d| d as u8).ok_or_else(|| format!("'{c}' is not a hex digit")))
        .collect::<Result<Vec<u8>, String>>()?;
    Ok(nibbles.chunks(2).map(|pair| (pair[0] << 4) | pair[1]).collect())
}

/// Parses a 20 byte hex literal into an `ethers::types::H160` at compile time.
///
/// ```ignore
/// const REGISTRY: H160 = h160!(0xd976d3b4f4e22a238c1A736b6612D22f17b6f64C);
/// ```
#[proc_macro]
pub fn h160(input: TokenStream) -> TokenStream {
    let literal = input.to_string();
    match address_bytes(&literal) {
        Ok(bytes) => quote! { ::ethers::types::H160([#(#bytes,)*]) }.into(),
        Err(e) => {
            let message = format!("h160!({literal}): {e}");
            quote! { compile_error!(#message) }.into()
        }
    }
}

/// Encodes a string literal as a right zero-padded `[u8; 32]`, the layout Audius contracts use
/// for registry keys and service types.
#[proc_macro]
pub fn bytes32(input: TokenStream) -> TokenStream {
    let literal = parse_macro_input!(input as LitStr);
    let value = literal.value();
    if value.len() > 32 {
        return syn::Error::new(
            literal.span(),
            format!("\"{value}\" is {} bytes, bytes32 holds at most 32", value.len()),
        )
        .to_compile_error()
        .into();
    }

    let mut bytes = [0u8; 32];
    bytes[..value.len()].copy_from_slice(value.as_bytes());
    quote! { [#(#bytes,)*] }.into()
}
