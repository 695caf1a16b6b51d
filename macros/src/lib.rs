use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, spanned::Spanned, ItemFn};

/// Test attribute used across rxwatch.
///
/// - Sync tests expand to `#[test]` natively and `wasm_bindgen_test` on
///   wasm32.
/// - Async tests run on a current-thread tokio runtime inside a `LocalSet`, so
///   `tokio::task::spawn_local` (and therefore `TokioScheduler`) is usable from
///   the test body.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
  let input = parse_macro_input!(item as ItemFn);

  let raw_args = proc_macro2::TokenStream::from(attr);
  if !raw_args.is_empty() {
    return TokenStream::from(
      syn::Error::new(
        raw_args.span(),
        "rxwatch_macro::test takes no arguments. Watchers are single-threaded, async tests \
         always run on a current-thread runtime with a LocalSet.",
      )
      .to_compile_error(),
    );
  }

  if input.sig.asyncness.is_none() {
    let expanded = quote! {
        #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
        #[cfg_attr(not(target_arch = "wasm32"), test)]
        #input
    };
    return TokenStream::from(expanded);
  }

  let ItemFn { attrs, vis, sig, block } = input;
  let expanded = quote! {
      #[cfg(not(target_arch = "wasm32"))]
      #[tokio::test(flavor = "current_thread")]
      #(#attrs)*
      #vis #sig {
        tokio::task::LocalSet::new()
          .run_until(async move #block)
          .await
      }
  };

  TokenStream::from(expanded)
}
