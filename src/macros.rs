/// Invokes `$mac` once for every supported arity, passing the argument names
/// and their type parameters.
///
/// Used to generate the positional `call` methods of the wrappers, which take
/// the arguments of the declared signature one by one instead of as a tuple.
macro_rules! for_each_arity {
    ($mac:ident) => {
        $mac!();
        $mac!(a1: A1);
        $mac!(a1: A1, a2: A2);
        $mac!(a1: A1, a2: A2, a3: A3);
        $mac!(a1: A1, a2: A2, a3: A3, a4: A4);
        $mac!(a1: A1, a2: A2, a3: A3, a4: A4, a5: A5);
        $mac!(a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6);
    };
}
