//! Fixed legal terms printed on the second page of a purchase order.

pub const TERMS_TITLE: &str = "自動車注文書 約款";

pub const ORDER_TERMS: &[(&str, &str)] = &[
    (
        "第1条（契約の成立）",
        "本契約は、注文者が本注文書に署名または記名押印し、販売店がこれを承諾したとき、または販売店が注文車両の登録手続もしくは納車準備に着手したときに成立するものとします。",
    ),
    (
        "第2条（代金の支払）",
        "注文者は、表面記載のお支払総額を、表面記載の支払方法および期日に従い販売店に支払うものとします。クレジットを利用する場合は、別途締結するクレジット契約の定めに従うものとします。",
    ),
    (
        "第3条（下取車）",
        "下取車がある場合、注文者は下取車の所有権、使用者名義その他の権利関係に瑕疵がないことを保証し、販売店の指定する日までに下取車および必要書類を引き渡すものとします。引渡し時の状態が査定時と著しく異なる場合、販売店は下取価格を改定できるものとします。",
    ),
    (
        "第4条（登録・届出）",
        "注文車両の登録または届出に必要な書類は、注文者が販売店の指定する日までに提出するものとします。書類の不備により登録が遅延した場合、販売店はその責を負わないものとします。",
    ),
    (
        "第5条（納車）",
        "納車は表面記載の納車予定日を目安とし、天災地変、輸送事情その他販売店の責に帰さない事由により遅延する場合があります。この場合、販売店は速やかに注文者に通知するものとします。",
    ),
    (
        "第6条（所有権の移転）",
        "注文車両の所有権は、注文者が代金全額を支払ったときに注文者に移転するものとします。クレジット利用の場合は、当該クレジット契約の定めによるものとします。",
    ),
    (
        "第7条（危険負担）",
        "納車前に、販売店の責に帰さない事由により注文車両が滅失または毀損した場合、販売店は注文者と協議の上、本契約を解除できるものとします。",
    ),
    (
        "第8条（契約の解除）",
        "注文者が代金の支払を遅延したとき、または本約款に違反したときは、販売店は相当期間を定めて催告の上、本契約を解除できるものとします。この場合、販売店は注文者に対し、これにより生じた損害の賠償を請求できるものとします。",
    ),
    (
        "第9条（注文者都合による解約）",
        "契約成立後に注文者の都合により解約する場合、注文者は販売店が既に支出した登録費用、整備費用、付属品の取付費用その他の実費および相当の損害金を負担するものとします。",
    ),
    (
        "第10条（保証）",
        "注文車両の保証は、販売店が別途交付する保証書の定めによるものとします。保証書の交付がない車両は、現状有姿での引渡しとなります。",
    ),
    (
        "第11条（個人情報の取扱い）",
        "販売店は、本契約に関して取得した注文者の個人情報を、登録手続、納車、アフターサービスおよび関連する商品・サービスのご案内の目的で利用し、法令に基づく場合を除き第三者に提供しないものとします。",
    ),
    (
        "第12条（合意管轄）",
        "本契約に関する紛争については、販売店の所在地を管轄する地方裁判所または簡易裁判所を第一審の専属的合意管轄裁判所とします。",
    ),
];
