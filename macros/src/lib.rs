use proc_macro::TokenStream;
use quote::quote;
use syn::{Ident, ItemStruct, parse_macro_input, spanned::Spanned};

/// Attribute macro `#[take_resources]` for peripheral resource structs.
///
/// For a struct `FooResources` with named fields it generates a
/// `take_foo_resources!($p)` macro that builds the struct by moving the
/// matching peripherals out of `$p`, looking each field up under its
/// `UPPERCASE` name (`pwm0` -> `$p.PWM0`). Splitting the `embassy_nrf`
/// peripheral singleton this way keeps each subsystem's claim explicit.
///
/// Only structs with named fields are supported.
#[proc_macro_attribute]
pub fn take_resources(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input_struct = parse_macro_input!(item as ItemStruct);
    let struct_name = &input_struct.ident;

    let fields = match &input_struct.fields {
        syn::Fields::Named(fields_named) => &fields_named.named,
        _ => panic!("#[take_resources] only works with named struct fields"),
    };

    // snake_case field -> UPPERCASE peripheral name
    let macro_fields = fields.iter().map(|f| {
        let field_name = &f.ident;
        let ident_str = field_name.as_ref().unwrap().to_string();
        let macro_ident = Ident::new(&ident_str.to_ascii_uppercase(), field_name.span());
        quote! {
            #field_name: $p.#macro_ident
        }
    });

    let macro_name = Ident::new(
        &format!("take_{}", pascal_to_snake(&struct_name.to_string())),
        struct_name.span(),
    );

    let expanded = quote! {
        #input_struct

        #[macro_export]
        macro_rules! #macro_name {
            ($p:ident) => {
                #struct_name {
                    #(#macro_fields),*
                }
            };
        }
    };
    TokenStream::from(expanded)
}

fn pascal_to_snake(name: &str) -> String {
    let mut snake = String::new();
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i != 0 {
                snake.push('_');
            }
            snake.push(ch.to_ascii_lowercase());
        } else {
            snake.push(ch);
        }
    }
    snake
}
